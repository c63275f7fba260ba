pub mod forum;
pub mod forum_reply;
pub mod idea;
pub mod idea_vote;
pub mod listing;
pub mod listing_participant;
pub mod mentorship;
pub mod mentorship_session;
pub mod success_story;
pub mod team;
pub mod team_member;
pub mod user;
