use crate::domain::error::{codes, DomainError};
use tokio::sync::watch;

/// キャンセル要求を送る側
/// ドロップしてもキャンセルにはならない。明示的に`cancel`を呼ぶ
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// キャンセル要求を受け取る側
/// 各ストレージ操作の前に`check`で確認する。実行中の操作は中断しない
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// 送信側と受信側の組を作成
    pub fn new() -> (CancellationHandle, CancellationSignal) {
        let (sender, receiver) = watch::channel(false);
        (CancellationHandle { sender }, CancellationSignal { receiver })
    }

    /// キャンセルされることのない信号
    pub fn none() -> CancellationSignal {
        let (_, signal) = Self::new();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// キャンセル済みならFailureを返す
    pub fn check(&self) -> Result<(), DomainError> {
        if self.is_cancelled() {
            return Err(DomainError::failure(
                codes::REQUEST_CANCELLED,
                "リクエストはキャンセルされました",
            ));
        }
        Ok(())
    }
}

/// ドロップ時にキャンセルを送るガード
/// HTTPハンドラーのフューチャーがクライアント切断で破棄されたときに使う
#[derive(Debug)]
pub struct CancelOnDrop {
    handle: Option<CancellationHandle>,
}

impl CancelOnDrop {
    pub fn new(handle: CancellationHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// 正常に完了したのでキャンセルを送らない
    pub fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}
