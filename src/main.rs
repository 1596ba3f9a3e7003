#![allow(dead_code)]

mod application;
mod cli;
mod data;
mod domain;
mod infra;
mod ml;
mod web;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("abalone_pipeline=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    cli.run()
}
