mod common;
mod flow;
