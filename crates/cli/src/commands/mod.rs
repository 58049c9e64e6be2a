pub mod confidence;
pub mod config_cmd;
pub mod serve;
pub mod summarize;
