pub mod admin;
pub mod auth;
pub mod forum;
pub mod idea;
pub mod leaderboard;
pub mod listing;
pub mod mentorship;
pub mod story;
pub mod team;
pub mod user;
