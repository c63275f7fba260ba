pub mod access;
pub mod hash;
pub mod jwt;
pub mod listing;
pub mod points;
pub mod team;
