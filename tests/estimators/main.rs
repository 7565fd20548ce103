#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod common;
mod contamination;
mod mom;
mod plain;
mod robust;
mod spkde;
