//! Cursor-driven traversal of paged collections.
//!
//! Items are visited strictly in order: every item of a page, then the next
//! page. A visitor returning `false` ends the traversal right after that item,
//! even in the middle of a page, and no further page is requested.

use async_trait::async_trait;
use tracing::trace;

use crate::error::Result;

/// One batch of items plus the cursor for the batch after it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_next(&self, cursor: &str) -> Result<Page<T>>;
}

#[async_trait]
pub trait Visitor<T: Send + 'static>: Send {
    /// Returns whether the traversal should continue.
    async fn visit(&mut self, item: T) -> Result<bool>;
}

/// Per-item consumer for [`for_each`], which decides continuation itself.
#[async_trait]
pub trait ItemSink<T: Send + 'static>: Send {
    async fn accept(&mut self, item: T) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The last page carried no cursor.
    Exhausted,
    /// A visitor asked to stop.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traversal {
    pub visited: usize,
    pub pages: usize,
    pub outcome: Outcome,
}

pub async fn paginate<T, F, V>(initial: Page<T>, fetcher: &F, visitor: &mut V) -> Result<Traversal>
where
    T: Send + 'static,
    F: PageFetcher<T> + ?Sized,
    V: Visitor<T> + ?Sized,
{
    let mut page = initial;
    let mut visited = 0;
    let mut pages = 1;

    loop {
        let Page { items, next_cursor } = page;
        trace!(page = pages, items = items.len(), "visiting page");
        for item in items {
            visited += 1;
            if !visitor.visit(item).await? {
                return Ok(Traversal {
                    visited,
                    pages,
                    outcome: Outcome::Stopped,
                });
            }
        }

        match next_cursor.filter(|c| !c.is_empty()) {
            Some(cursor) => {
                page = fetcher.fetch_next(&cursor).await?;
                pages += 1;
            }
            None => {
                return Ok(Traversal {
                    visited,
                    pages,
                    outcome: Outcome::Exhausted,
                });
            }
        }
    }
}

struct Collect<T> {
    items: Vec<T>,
    fetch_all: bool,
}

#[async_trait]
impl<T: Send + 'static> Visitor<T> for Collect<T> {
    async fn visit(&mut self, item: T) -> Result<bool> {
        self.items.push(item);
        Ok(self.fetch_all)
    }
}

/// Gathers items. Without `fetch_all` only the first item is taken.
pub async fn collect_all<T, F>(initial: Page<T>, fetcher: &F, fetch_all: bool) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: PageFetcher<T> + ?Sized,
{
    let mut collect = Collect {
        items: Vec::new(),
        fetch_all,
    };
    paginate(initial, fetcher, &mut collect).await?;
    Ok(collect.items)
}

struct ForEach<'a, S: ?Sized> {
    sink: &'a mut S,
    fetch_all: bool,
}

#[async_trait]
impl<'a, T, S> Visitor<T> for ForEach<'a, S>
where
    T: Send + 'static,
    S: ItemSink<T> + ?Sized,
{
    async fn visit(&mut self, item: T) -> Result<bool> {
        self.sink.accept(item).await?;
        Ok(self.fetch_all)
    }
}

/// Hands each item to `sink`. Without `fetch_all` only the first item is handed over.
pub async fn for_each<T, F, S>(
    initial: Page<T>,
    fetcher: &F,
    fetch_all: bool,
    sink: &mut S,
) -> Result<Traversal>
where
    T: Send + 'static,
    F: PageFetcher<T> + ?Sized,
    S: ItemSink<T> + ?Sized,
{
    let mut visitor = ForEach { sink, fetch_all };
    paginate(initial, fetcher, &mut visitor).await
}

struct FindFirst<T, P> {
    predicate: P,
    found: Option<T>,
}

#[async_trait]
impl<T, P> Visitor<T> for FindFirst<T, P>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send,
{
    async fn visit(&mut self, item: T) -> Result<bool> {
        if (self.predicate)(&item) {
            self.found = Some(item);
            return Ok(false);
        }
        Ok(true)
    }
}

/// First item matching `predicate`, walking pages until the cursor chain ends.
pub async fn find_first<T, F, P>(initial: Page<T>, fetcher: &F, predicate: P) -> Result<Option<T>>
where
    T: Send + 'static,
    F: PageFetcher<T> + ?Sized,
    P: FnMut(&T) -> bool + Send,
{
    let mut finder = FindFirst {
        predicate,
        found: None,
    };
    paginate(initial, fetcher, &mut finder).await?;
    Ok(finder.found)
}
