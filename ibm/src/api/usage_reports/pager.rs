//! Offset pager over `GET /v1/resource-usage-reports`

use futures::stream::{self, Stream};
use thiserror::Error;
use tfplug::Context;

use super::models::{GetResourceUsageReportOptions, Reports, ResourceUsageReport};
use super::UsageReportsApi;
use crate::api::client::Client;
use crate::api::error::ApiError;

#[derive(Debug, Error)]
pub enum PagerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("the 'options.Offset' field should not be set")]
    OffsetSet,

    #[error("no more results available")]
    Exhausted,

    #[error("error retrieving 'offset' query parameter from URL '{href}': {reason}")]
    InvalidNextHref { href: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
enum PagerState {
    /// `next` is the cursor for the coming request, None before the first page
    HasMore { next: Option<String> },
    Exhausted,
}

/// Walks every page of a usage report query.
///
/// A failed page leaves the cursor where it was, so `get_next` may be
/// called again. The pager itself never retries.
pub struct GetResourceUsageReportPager {
    client: Client,
    options: GetResourceUsageReportOptions,
    state: PagerState,
}

impl GetResourceUsageReportPager {
    pub fn new(client: Client, options: GetResourceUsageReportOptions) -> Result<Self, PagerError> {
        if options.offset.as_deref().is_some_and(|o| !o.is_empty()) {
            return Err(PagerError::OffsetSet);
        }

        Ok(Self {
            client,
            options,
            state: PagerState::HasMore { next: None },
        })
    }

    pub fn has_next(&self) -> bool {
        matches!(self.state, PagerState::HasMore { .. })
    }

    pub async fn get_next(&mut self, ctx: &Context) -> Result<Vec<ResourceUsageReport>, PagerError> {
        let offset = match &self.state {
            PagerState::Exhausted => return Err(PagerError::Exhausted),
            PagerState::HasMore { next } => next.clone(),
        };

        let options = GetResourceUsageReportOptions {
            offset,
            ..self.options.clone()
        };
        let page = UsageReportsApi::new(&self.client)
            .get_resource_usage_report(ctx, &options)
            .await?;

        let next = next_offset(&page)?;
        tracing::debug!(
            reports = page.reports.len(),
            has_next = next.is_some(),
            "fetched usage report page"
        );
        self.state = match next {
            Some(next) => PagerState::HasMore { next: Some(next) },
            None => PagerState::Exhausted,
        };

        Ok(page.reports)
    }

    /// Fetches the remaining pages and concatenates them in arrival order
    pub async fn get_all(&mut self, ctx: &Context) -> Result<Vec<ResourceUsageReport>, PagerError> {
        let mut all = Vec::new();
        while self.has_next() {
            all.extend(self.get_next(ctx).await?);
        }
        Ok(all)
    }

    /// Pages as a stream; ends after the last page or the first error
    pub fn into_stream(
        self,
        ctx: Context,
    ) -> impl Stream<Item = Result<Vec<ResourceUsageReport>, PagerError>> {
        stream::unfold((self, ctx), |(mut pager, ctx)| async move {
            if !pager.has_next() {
                return None;
            }
            let page = pager.get_next(&ctx).await;
            if page.is_err() {
                pager.state = PagerState::Exhausted;
            }
            Some((page, (pager, ctx)))
        })
    }
}

/// Cursor for the following page, read from the `offset` parameter of
/// `next.href`
fn next_offset(page: &Reports) -> Result<Option<String>, PagerError> {
    let href = match &page.next {
        Some(link) => &link.href,
        None => return Ok(None),
    };

    // next.href may be relative to the service URL
    let base = url::Url::parse("https://localhost/").map_err(|e| PagerError::InvalidNextHref {
        href: href.clone(),
        reason: e.to_string(),
    })?;
    let url = base.join(href).map_err(|e| PagerError::InvalidNextHref {
        href: href.clone(),
        reason: e.to_string(),
    })?;

    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "offset")
        .map(|(_, value)| value.into_owned()))
}

#[cfg(test)]
#[path = "pager_test.rs"]
mod tests;
