#[cfg(feature = "git")]
pub mod git;

#[cfg(feature = "perforce")]
pub mod perforce;
