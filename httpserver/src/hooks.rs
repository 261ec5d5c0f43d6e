//! Ordered cleanup callbacks run after the listener drained.

use std::fmt;
use std::future::Future;

use crate::context::ShutdownContext;
use crate::error::{BoxError, HookError, HookErrors};
use crate::listener::BoxFuture;
use crate::logger::Logger;

type Hook = Box<dyn FnOnce(ShutdownContext) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Append-only list of shutdown hooks, executed in registration order.
#[derive(Default)]
pub(crate) struct ShutdownHooks {
    hooks: Vec<Hook>,
}

impl ShutdownHooks {
    pub(crate) fn push<F, Fut, E>(&mut self, hook: F)
    where
        F: FnOnce(ShutdownContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.hooks.push(Box::new(
            move |ctx| -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(async move { hook(ctx).await.map_err(Into::into) })
            },
        ));
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Runs every hook sequentially against the shared deadline.
    ///
    /// A failing hook does not prevent the next one from running. A hook
    /// still running when the deadline passes is dropped and no further hook
    /// is started.
    pub(crate) async fn run(self, ctx: ShutdownContext, logger: &dyn Logger) -> Result<(), HookErrors> {
        let total = self.hooks.len();
        let mut errors = Vec::new();

        for (index, hook) in self.hooks.into_iter().enumerate() {
            logger.debug(&format!("Running shutdown hook {}/{total}", index + 1));
            match tokio::time::timeout_at(ctx.deadline(), hook(ctx)).await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => errors.push(HookError::Failed { index, source }),
                Err(_) => {
                    errors.push(HookError::DeadlineExceeded {
                        index,
                        not_run: total - index,
                    });
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HookErrors::new(errors))
        }
    }
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}
