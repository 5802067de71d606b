pub mod accept;
pub mod bounties;
pub mod cards;
pub mod create;
pub mod login;
pub mod my_solutions;
pub mod show;
pub mod solve;
pub mod vote;
