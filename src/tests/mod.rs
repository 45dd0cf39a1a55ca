
mod test_key_builder;
