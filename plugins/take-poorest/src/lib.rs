dollargame::export_solver! {
    name: "TakePoorest",
    description: "Finds the poorest node and takes from its neighbors.",
    solve: dollargame::samples::take_poorest,
}
