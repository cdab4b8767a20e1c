//! The eight transfer phases and their fixed order.

use std::fmt;

/// One step of a load's visit to a segment.
///
/// Phases always run in declaration order; a transfer never skips back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferPhase {
    RxBeforeTransfer,
    RxTransfer,
    RxTransferComplete,
    Process,
    TxBeforeTransfer,
    TxTransfer,
    TxTransferComplete,
    TxAfterTransfer,
    Done,
}

impl TransferPhase {
    pub const ALL: [TransferPhase; 9] = [
        TransferPhase::RxBeforeTransfer,
        TransferPhase::RxTransfer,
        TransferPhase::RxTransferComplete,
        TransferPhase::Process,
        TransferPhase::TxBeforeTransfer,
        TransferPhase::TxTransfer,
        TransferPhase::TxTransferComplete,
        TransferPhase::TxAfterTransfer,
        TransferPhase::Done,
    ];

    /// The phase that follows this one.  `Done` is terminal.
    pub fn next(self) -> TransferPhase {
        use TransferPhase::*;
        match self {
            RxBeforeTransfer   => RxTransfer,
            RxTransfer         => RxTransferComplete,
            RxTransferComplete => Process,
            Process            => TxBeforeTransfer,
            TxBeforeTransfer   => TxTransfer,
            TxTransfer         => TxTransferComplete,
            TxTransferComplete => TxAfterTransfer,
            TxAfterTransfer    => Done,
            Done               => Done,
        }
    }

    /// `true` while the load is still entering the segment.  A segment with a
    /// transfer in one of these phases is "receiving".
    pub fn is_receiving(self) -> bool {
        matches!(self, TransferPhase::RxBeforeTransfer | TransferPhase::RxTransfer)
    }

    pub fn as_str(self) -> &'static str {
        use TransferPhase::*;
        match self {
            RxBeforeTransfer   => "rx_before",
            RxTransfer         => "rx",
            RxTransferComplete => "rx_complete",
            Process            => "process",
            TxBeforeTransfer   => "tx_before",
            TxTransfer         => "tx",
            TxTransferComplete => "tx_complete",
            TxAfterTransfer    => "tx_after",
            Done               => "done",
        }
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
