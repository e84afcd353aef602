pub mod table;
pub mod word_list;
