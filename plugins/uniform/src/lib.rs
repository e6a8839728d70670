dollargame::export_generator! {
    name: "Uniform",
    description: "Simple generator.",
    generate: dollargame::samples::uniform,
}
