mod call_id;
mod codec;
mod envelope;
mod method_path;
