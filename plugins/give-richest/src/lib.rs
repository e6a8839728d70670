dollargame::export_solver! {
    name: "GiveRichest",
    description: "Finds the richest node and gives to its neighbors.",
    solve: dollargame::samples::give_richest,
}
