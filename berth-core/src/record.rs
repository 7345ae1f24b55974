use crate::Value;

/// Ordered attribute to value mapping, the unit of data exchanged with callers.
///
/// Insertion order is preserved so generated column lists stay deterministic.
/// Setting an attribute twice keeps the last value.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(field) = self.fields.iter_mut().find(|(n, ..)| *n == name) {
            field.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, ..)| n == name)
            .map(|(.., v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object, converting each member through
    /// [`Value::from_json`].
    pub fn from_json(value: &serde_json::Value) -> crate::Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(crate::Error::msg("A record must be a JSON object"));
        };
        Ok(object
            .iter()
            .map(|(name, v)| (name.clone(), Value::from_json(v)))
            .collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}
