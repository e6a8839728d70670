dollargame::export_solver! {
    name: "BogoSolver",
    description: "Performs random moves. Probably not going to solve any graph ever.",
    solve: dollargame::samples::bogo,
}
