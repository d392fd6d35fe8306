mod build;
mod config;
mod naming;
