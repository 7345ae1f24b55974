use crate::{PostgresDriver, ValueHolder, util::stream_query_results};
use berth_core::{
    Connection, Driver, Error, ErrorContext, Executor, Query, QueryResult, Result,
    stream::{Stream, TryStreamExt},
};
use std::{borrow::Cow, sync::Arc};
use tokio::spawn;
use tokio_postgres::NoTls;
use url::Url;
use urlencoding::decode;

#[derive(Debug)]
pub struct PostgresConnection {
    pub(crate) client: tokio_postgres::Client,
}

impl Executor for PostgresConnection {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query: {}", query));
        stream_query_results(async move || {
            let params = query
                .values
                .into_iter()
                .map(ValueHolder)
                .collect::<Vec<_>>();
            self.client
                .query_raw(&query.sql, params)
                .await
                .map_err(Into::into)
        })
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for PostgresConnection {
    async fn connect(url: Cow<'static, str>) -> Result<Self> {
        let context = || format!("While trying to connect to `{}`", url);
        let url = decode(&url).with_context(context)?;
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "Postgres connection url must start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let url = Url::parse(&url).with_context(context)?;
        let (client, connection) = tokio_postgres::connect(url.as_str(), NoTls)
            .await
            .with_context(context)?;
        spawn(async move {
            if let Err(e) = connection.await
                && !e.is_closed()
            {
                log::error!("Postgres connection error: {:#}", e);
            }
        });
        Ok(Self { client })
    }
}
