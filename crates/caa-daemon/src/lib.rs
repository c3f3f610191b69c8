pub mod http;
pub mod output;
pub mod schedule;
pub mod scrape;
