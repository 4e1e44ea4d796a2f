mod frequencies;
mod scan;

pub(crate) use frequencies::cmd_frequencies;
pub(crate) use scan::cmd_scan;
