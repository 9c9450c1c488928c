// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide lazily initialized collaborator handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::StorybotError;

type InitFuture<T> = Pin<Box<dyn Future<Output = Result<Arc<T>, StorybotError>> + Send>>;
type InitFn<T> = Box<dyn Fn() -> InitFuture<T> + Send + Sync>;

/// A collaborator that is connected at most once, on first use.
///
/// Concurrent callers of [`SharedSession::get`] during initialization all wait
/// on the same attempt. A failed attempt leaves the cell empty so the next
/// caller retries.
pub struct SharedSession<T: ?Sized + Send + Sync + 'static> {
    cell: OnceCell<Arc<T>>,
    init: InitFn<T>,
}

impl<T: ?Sized + Send + Sync + 'static> SharedSession<T> {
    /// Creates a handle that runs `init` on first access.
    pub fn lazy<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>, StorybotError>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            init: Box::new(move || Box::pin(init())),
        }
    }

    /// Creates a handle around an already connected value.
    pub fn ready(value: Arc<T>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(value)),
            init: Box::new(|| {
                Box::pin(async {
                    Err(StorybotError::Internal(
                        "ready session has no initializer".into(),
                    ))
                })
            }),
        }
    }

    /// Returns the connected value, initializing it if needed.
    pub async fn get(&self) -> Result<Arc<T>, StorybotError> {
        self.cell
            .get_or_try_init(|| (self.init)())
            .await
            .map(Arc::clone)
    }

    /// Returns `true` once initialization has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: ?Sized + Send + Sync + 'static> std::fmt::Debug for SharedSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSession")
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}
