//! Cross-crate integration scenarios

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod cancellation;
#[cfg(test)]
mod devnet;
#[cfg(test)]
mod end_to_end;
#[cfg(test)]
mod restart;
