use crate::ValueHolder;
use async_stream::try_stream;
use berth_core::{
    Error, QueryResult, Row, RowLabeled, RowNames, RowsAffected,
    stream::{Stream, StreamExt},
};
use std::pin::pin;

pub(crate) fn row_values(row: tokio_postgres::Row) -> berth_core::Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(..) => {
                let col = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect::<berth_core::Result<Row>>()
}

/// Adapt a postgres row stream into labeled rows followed by the affected
/// rows summary once the backend reports it.
pub(crate) fn stream_query_results(
    rows: impl AsyncFnOnce() -> berth_core::Result<tokio_postgres::RowStream>,
) -> impl Stream<Item = berth_core::Result<QueryResult>> {
    try_stream! {
        let stream = rows().await?;
        let mut stream = pin!(stream);
        let mut labels: Option<RowNames> = None;
        while let Some(row) = stream.next().await.transpose()? {
            let labels = labels.get_or_insert_with(|| {
                row.columns().iter().map(|c| c.name().to_string()).collect()
            });
            yield QueryResult::Row(RowLabeled {
                labels: labels.clone(),
                values: row_values(row)?,
            });
        }
        if let Some(rows_affected) = stream.rows_affected() {
            yield QueryResult::Affected(RowsAffected { rows_affected });
        }
    }
}
