dollargame::export_generator! {
    name: "Star",
    description: "Generates a graph where all nodes are connected to one common (center) node.",
    generate: dollargame::samples::star,
}
