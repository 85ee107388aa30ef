mod budget;
mod collision;
mod common;
mod materials;
mod scenarios;
mod subsets;
#[cfg(feature = "wavefront")]
mod wavefront;
