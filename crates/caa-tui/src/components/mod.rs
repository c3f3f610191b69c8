pub mod song_list;
