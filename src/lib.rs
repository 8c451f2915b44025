#![forbid(unsafe_code)]

pub mod browser;
pub mod characters;
pub mod cli;
pub mod grab;
pub mod logging;
pub mod prerender;
pub mod sanitize;
pub mod site;
pub mod store;
pub mod stylesheet;
pub mod timing;
pub mod worker;
