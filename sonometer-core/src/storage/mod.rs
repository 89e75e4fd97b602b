pub mod streak_file;
