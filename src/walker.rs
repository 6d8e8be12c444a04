//! Bounded walking of cursor-paginated collections.
//!
//! A walk issues one list call at a time, feeding each response's cursor into
//! the next request, until the server runs out of pages or the caller's total
//! limit is reached. Requested page sizes never exceed the endpoint's maximum
//! and shrink to the remaining allowance near the end of a capped walk.

use crate::error::{RemoteCallError, WalkError};
use crate::page::{Cursor, PageBounds, PageRequest, PageResult, WalkConfig};
use async_trait::async_trait;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use std::convert::TryFrom;
use std::future::Future;
use std::marker::PhantomData;
use tokio::sync::watch;
use tracing::Instrument;

/// One remote round trip for a single page.
///
/// Implementations own retry and timeout policy; the walker calls them
/// sequentially and never retries on its own.
#[async_trait]
pub trait FetchPage<T>: Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult<T>, RemoteCallError>;
}

/// A [`FetchPage`] backed by a closure returning a future.
pub struct FetchFn<F>(F);

/// Use a closure as a page source.
///
/// The returned future must own what it needs, so clone any shared client
/// into it.
pub fn fetch_fn<F>(f: F) -> FetchFn<F> {
    FetchFn(f)
}

#[async_trait]
impl<T, F, Fut> FetchPage<T> for FetchFn<F>
where
    F: Fn(PageRequest) -> Fut + Sync,
    Fut: Future<Output = Result<PageResult<T>, RemoteCallError>> + Send + 'static,
    T: Send + 'static,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult<T>, RemoteCallError> {
        (self.0)(request).await
    }
}

/// Receiving side of an external cancellation signal.
#[derive(Debug, Clone)]
pub struct Cancellation(Option<watch::Receiver<bool>>);

/// Sending side of a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl Cancellation {
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), Self(Some(rx)))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self(None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The server returned no further cursor.
    Exhausted,
    /// The total limit was reached.
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Idle,
    Fetching,
    HasMore,
    Done(DoneReason),
    Failed { emitted: u64 },
}

impl WalkStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed { .. })
    }
}

/// Mutable progress of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkState {
    pub current_cursor: Option<Cursor>,
    pub emitted: u64,
    pub next_request_page_size: u32,
    pub pages: u32,
}

/// Reported once per retrieved page while the caller steers pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub retrieved: usize,
    pub cursor: Option<Cursor>,
    pub emitted: u64,
}

/// How a drained walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Exhausted,
    /// Stopped on the total limit. `resume` continues the listing where it
    /// stopped, unless the last page had to be cut short.
    LimitReached { resume: Option<Cursor> },
    Interrupted(WalkError),
}

/// Everything a drained walk emitted, and why it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub completion: Completion,
}

impl<T> Listing<T> {
    /// The server had nothing more to give.
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Exhausted
    }

    pub fn error(&self) -> Option<&WalkError> {
        match &self.completion {
            Completion::Interrupted(e) => Some(e),
            _ => None,
        }
    }
}

type ProgressFn<'a> = Box<dyn FnMut(&PageProgress) + Send + 'a>;

pub struct PageWalker<'a, T, F: ?Sized> {
    fetch: &'a F,
    config: WalkConfig,
    state: WalkState,
    status: WalkStatus,
    cancel: Cancellation,
    truncated: bool,
    on_page: Option<ProgressFn<'a>>,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T, F> PageWalker<'a, T, F>
where
    F: FetchPage<T> + ?Sized,
{
    pub fn new(fetch: &'a F, config: WalkConfig, cancel: Cancellation) -> Result<Self, WalkError> {
        config.validate()?;
        let state = WalkState {
            current_cursor: config.start_cursor.clone(),
            emitted: 0,
            next_request_page_size: config.preferred_page_size(),
            pages: 0,
        };
        Ok(Self {
            fetch,
            config,
            state,
            status: WalkStatus::Idle,
            cancel,
            truncated: false,
            on_page: None,
            _item: PhantomData,
        })
    }

    /// Called after every page when the walk was given a start cursor or a
    /// total limit.
    pub fn on_page(mut self, f: impl FnMut(&PageProgress) + Send + 'a) -> Self {
        self.on_page = Some(Box::new(f));
        self
    }

    pub fn state(&self) -> &WalkState {
        &self.state
    }

    pub fn status(&self) -> WalkStatus {
        self.status
    }

    /// Cursor to continue from, if the walk ended with data left over.
    pub fn resume_cursor(&self) -> Option<&Cursor> {
        if self.truncated {
            None
        } else {
            self.state.current_cursor.as_ref()
        }
    }

    fn remaining(&self) -> Option<u64> {
        self.config
            .total_limit
            .map(|limit| limit.saturating_sub(self.state.emitted))
    }

    fn request_size(&self) -> u32 {
        let preferred = self.config.preferred_page_size();
        match self.remaining() {
            Some(remaining) => {
                let size = u32::try_from(remaining).unwrap_or(u32::MAX).min(preferred);
                size.max(self.config.bounds.min)
            }
            None => preferred,
        }
    }

    /// Fetch the next page, returning `None` once the walk has ended.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, WalkError> {
        if self.status.is_terminal() {
            return Ok(None);
        }

        if self.cancel.is_cancelled() {
            tracing::debug!(emitted = self.state.emitted, "walk cancelled");
            self.status = WalkStatus::Failed {
                emitted: self.state.emitted,
            };
            return Err(WalkError::Cancelled {
                emitted: self.state.emitted,
            });
        }

        let page_size = self.request_size();
        self.state.next_request_page_size = page_size;
        let request = PageRequest {
            cursor: self.state.current_cursor.clone(),
            page_size_hint: Some(page_size),
        };

        self.status = WalkStatus::Fetching;
        let page_number = self.state.pages + 1;
        let result = self
            .fetch
            .fetch_page(request)
            .instrument(tracing::debug_span!("fetch_page", page = page_number, page_size))
            .await;

        let page = match result {
            Ok(page) => page,
            Err(source) => {
                tracing::debug!(err = %source, emitted = self.state.emitted, "page fetch failed");
                self.status = WalkStatus::Failed {
                    emitted: self.state.emitted,
                };
                return Err(WalkError::Remote {
                    source,
                    emitted: self.state.emitted,
                });
            }
        };

        self.state.pages = page_number;
        let used_cursor = std::mem::replace(&mut self.state.current_cursor, page.next_cursor);
        let mut items = page.items;
        let retrieved = items.len();

        if let Some(remaining) = self.remaining() {
            let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
            if items.len() > remaining {
                tracing::debug!(retrieved, remaining, "discarding items beyond total limit");
                items.truncate(remaining);
                self.truncated = true;
            }
        }
        self.state.emitted += items.len() as u64;

        self.notify(retrieved, used_cursor);

        let limit_reached = self.remaining() == Some(0);
        self.status = if self.state.current_cursor.is_none() && !self.truncated {
            WalkStatus::Done(DoneReason::Exhausted)
        } else if limit_reached {
            WalkStatus::Done(DoneReason::LimitReached)
        } else {
            WalkStatus::HasMore
        };

        Ok(Some(items))
    }

    fn notify(&mut self, retrieved: usize, cursor: Option<Cursor>) {
        let page = self.state.pages;
        let emitted = self.state.emitted;
        if !self.config.is_manual() {
            tracing::debug!(page, retrieved, emitted, "page retrieved");
            return;
        }

        tracing::info!(
            page,
            retrieved,
            emitted,
            cursor = cursor.as_ref().map(Cursor::as_str).unwrap_or("<start>"),
            "page retrieved"
        );
        if let Some(f) = self.on_page.as_mut() {
            f(&PageProgress {
                page,
                retrieved,
                cursor,
                emitted,
            });
        }
    }

    /// Run the walk to its end, keeping whatever was emitted before any
    /// failure.
    pub async fn drain(mut self) -> Listing<T> {
        let mut items = Vec::new();
        loop {
            match self.next_page().await {
                Ok(Some(page)) => items.extend(page),
                Ok(None) => break,
                Err(e) => {
                    return Listing {
                        items,
                        completion: Completion::Interrupted(e),
                    }
                }
            }
        }

        let completion = match self.status {
            WalkStatus::Done(DoneReason::LimitReached) => Completion::LimitReached {
                resume: self.resume_cursor().cloned(),
            },
            _ => Completion::Exhausted,
        };
        tracing::debug!(nitems = items.len(), pages = self.state.pages, "walk finished");
        Listing { items, completion }
    }

    /// Items in server order; a failure is the last element of the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, WalkError>> + 'a
    where
        T: 'a,
    {
        stream::unfold(Some(self), |walker| async move {
            let mut walker = walker?;
            match walker.next_page().await {
                Ok(Some(items)) => Some((Ok(items), Some(walker))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .flat_map(|page| match page {
            Ok(items) => stream::iter(items.into_iter().map(Ok)).left_stream(),
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        })
    }
}

/// Lazily walk every page of a collection.
///
/// An invalid configuration yields a single error before any call is made.
pub fn walk_all<'a, T, F>(
    fetch: &'a F,
    config: WalkConfig,
    cancel: Cancellation,
) -> impl Stream<Item = Result<T, WalkError>> + 'a
where
    F: FetchPage<T> + ?Sized,
    T: 'a,
{
    match PageWalker::new(fetch, config, cancel) {
        Ok(walker) => walker.into_stream().left_stream(),
        Err(e) => stream::once(future::ready(Err(e))).right_stream(),
    }
}

/// Fetch exactly one page, leaving pagination to the caller.
///
/// A page size hint is clamped into `bounds`; a missing or zero hint is
/// left for the server to default.
pub async fn walk_one_page<T, F>(
    fetch: &F,
    request: PageRequest,
    bounds: PageBounds,
) -> Result<PageResult<T>, RemoteCallError>
where
    F: FetchPage<T> + ?Sized,
{
    let request = PageRequest {
        page_size_hint: request
            .page_size_hint
            .filter(|size| *size > 0)
            .map(|size| bounds.clamp(size)),
        ..request
    };
    tracing::debug!(cursor = ?request.cursor, page_size = ?request.page_size_hint, "fetching single page");
    fetch.fetch_page(request).await
}
