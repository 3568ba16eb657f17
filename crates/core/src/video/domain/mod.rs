pub mod frame_codec;
pub mod frame_source;
pub mod tile_writer;
