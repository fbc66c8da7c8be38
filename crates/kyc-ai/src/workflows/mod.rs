pub mod governance;
pub mod kyc;
pub mod loans;
pub mod notifications;

mod sequence;
#[cfg(test)]
pub(crate) mod test_support;

pub use sequence::IdSequence;
