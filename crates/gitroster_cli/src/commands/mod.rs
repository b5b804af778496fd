pub(crate) mod import;
pub(crate) mod meta;
#[cfg(feature = "migrate")]
pub(crate) mod migrate;
pub(crate) mod status;
