pub mod db;
pub mod song_data;
pub mod store;
