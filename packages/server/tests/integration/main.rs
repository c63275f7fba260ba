mod admin;
mod common;
mod forum;
mod idea;
mod listing;
mod user;
