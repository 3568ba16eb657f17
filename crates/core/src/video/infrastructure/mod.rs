pub mod ffmpeg_yuv_reader;
pub mod nv21_frame_codec;
pub mod png_tile_writer;
