pub mod path_validator;
pub mod wav_writer;
