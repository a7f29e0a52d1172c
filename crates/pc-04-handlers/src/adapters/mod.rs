pub mod queued_tracker;
