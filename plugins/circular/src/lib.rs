dollargame::export_generator! {
    name: "Circular",
    description: "Generates a circular graph.",
    generate: dollargame::samples::circular,
}
