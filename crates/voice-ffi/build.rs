fn main() {
    uniffi::generate_scaffolding("src/voice.udl").unwrap();
}
