pub mod waitlist_user;
