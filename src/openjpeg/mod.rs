//! OpenJPEG backend for the [`Codec`](crate::codec::Codec) contract.
//!
//! Every native object (codec handle, stream, image) lives in a guard whose `Drop`
//! releases it exactly once, so any early return tears down what was built so far.

pub(crate) use openjpeg_sys as sys;

use crate::quality::ProgressionOrder;
use crate::signature::ContainerKind;

mod codec;
mod image;
mod stream;

pub use codec::OpenJpeg;

impl From<ContainerKind> for sys::CODEC_FORMAT {
    fn from(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Jp2 => sys::CODEC_FORMAT::OPJ_CODEC_JP2,
            ContainerKind::J2k => sys::CODEC_FORMAT::OPJ_CODEC_J2K,
        }
    }
}

impl From<ProgressionOrder> for sys::PROG_ORDER {
    fn from(order: ProgressionOrder) -> Self {
        match order {
            ProgressionOrder::Lrcp => sys::PROG_ORDER::OPJ_LRCP,
            ProgressionOrder::Rlcp => sys::PROG_ORDER::OPJ_RLCP,
            ProgressionOrder::Rpcl => sys::PROG_ORDER::OPJ_RPCL,
            ProgressionOrder::Pcrl => sys::PROG_ORDER::OPJ_PCRL,
            ProgressionOrder::Cprl => sys::PROG_ORDER::OPJ_CPRL,
        }
    }
}
