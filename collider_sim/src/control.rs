//! Run-wide stop decision.
//!
//! A stop request reaches one worker (a window close, Ctrl-C, a test); the
//! vote spreads it so every worker ends after the same step.

use async_trait::async_trait;
use collider_core::{CoreError, StopPolicy};
use collider_env::{MessageTag, Rank, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared quit flag.
#[derive(Debug, Clone, Default)]
pub struct QuitHandle(Arc<AtomicBool>);

impl QuitHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the run to stop at the next step boundary.
    pub fn request_quit(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// All-workers vote on whether to run another step.
///
/// Every step each worker broadcasts its own flag and receives everyone
/// else's; the run continues only if all flags say so. The flags travel as
/// buffered sends, so the vote never blocks on a slow peer's receive.
pub struct QuitVote<Net: Transport> {
    net: Arc<Net>,
    quit: QuitHandle,
}

impl<Net: Transport> QuitVote<Net> {
    pub fn new(net: Arc<Net>, quit: QuitHandle) -> Self {
        Self { net, quit }
    }

    fn peers(&self) -> impl Iterator<Item = Rank> {
        let me = self.net.rank();
        (0..self.net.size()).map(Rank::from).filter(move |r| *r != me)
    }
}

#[async_trait]
impl<Net: Transport> StopPolicy for QuitVote<Net> {
    async fn keep_going(&mut self, step: u64) -> Result<bool, CoreError> {
        let mine = !self.quit.is_requested();

        for peer in self.peers() {
            self.net
                .send(peer, MessageTag::Terminate, vec![u8::from(mine)])
                .await?;
        }

        let mut all = mine;
        for peer in self.peers() {
            let flag = self.net.recv(peer, MessageTag::Terminate).await?;
            all &= flag.first().is_some_and(|f| *f != 0);
        }

        if !all {
            info!(rank = %self.net.rank(), step, "stop agreed");
        }
        Ok(all)
    }
}
