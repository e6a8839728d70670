#[cfg(test)]
mod tests {
    use std::ffi::CStr;
    use std::fs;
    use std::io;
    use std::os::raw::c_char;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use unordered_pair::UnorderedPair;

    use crate::context::{GeneratorContext, GeneratorParams, SolverContext};
    use crate::error::{Error, MalformedGraph};
    use crate::generation::{generate_graph, GraphSource};
    use crate::graph::{Edge, Graph, NodeValue};
    use crate::moves::{Move, MoveKind};
    use crate::plugin::{check_preconditions, BuiltinGenerator, BuiltinSolver, GenerateFn, Generator, Plugin, Solver};
    use crate::registry::{Registry, SOLVERS_DIR};
    use crate::samples;
    use crate::supervisor::{SolveFailure, SolveOutcome, Supervisor, SupervisorConfig};
    use crate::{bench, DynamicSolver, RetryPolicy};

    fn cycle(values: Vec<NodeValue>) -> Graph {
        let n = values.len() as u32;
        let edges = (0..n).map(|node| UnorderedPair(node, (node + 1) % n)).collect::<Vec<Edge>>();
        Graph::build(values, edges).unwrap()
    }

    fn quick_supervisor() -> Supervisor {
        Supervisor::new(SupervisorConfig::default()
            .with_timeout(Duration::from_millis(50))
            .with_grace(Some(Duration::from_millis(50))))
    }

    fn fixed_cycle(ctx: &mut GeneratorContext<'_>, _params: &GeneratorParams) -> Result<(), MalformedGraph> {
        ctx.build(vec![2, -1, 2, -2], [UnorderedPair(0, 1), UnorderedPair(1, 2), UnorderedPair(2, 3), UnorderedPair(3, 0)])
            .map(|_| ())
    }

    const FIXED: BuiltinGenerator = BuiltinGenerator::new("Fixed", "Always the same four-node cycle.", fixed_cycle);

    struct Panicking;

    impl Solver for Panicking {
        fn name(&self) -> &str {
            "Panicking"
        }

        fn description(&self) -> &str {
            "Panics right away."
        }

        fn solve(&self, _ctx: &mut SolverContext) -> crate::Result<()> {
            panic!("boom")
        }
    }

    mod exported {
        use crate::context::{GeneratorContext, GeneratorParams, SolverContext};
        use crate::error::MalformedGraph;
        use crate::samples;

        fn strict_star(ctx: &mut GeneratorContext<'_>, params: &GeneratorParams) -> Result<(), MalformedGraph> {
            assert!(params.size > 0, "empty graph requested");
            samples::star(ctx, params)
        }

        fn strict_take_poorest(ctx: &mut SolverContext) {
            assert!(ctx.graph().len() > 1, "nothing to take from");
            samples::take_poorest(ctx)
        }

        crate::export_generator! {
            name: "StrictStar",
            description: "Star, refusing empty graphs.",
            generate: strict_star,
        }

        crate::export_solver! {
            name: "StrictTakePoorest",
            description: "TakePoorest, refusing single nodes.",
            solve: strict_take_poorest,
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn give_moves_value_to_neighbors() {
        let mut graph = cycle(vec![1, -1, 2, -2]);
        graph.give(0);
        assert_eq!(graph.values(), &[-1, 0, 2, -1]);
    }

    #[test]
    fn moves_conserve_total() {
        let mut graph = cycle(vec![1, -1, 2, -2]);
        let before = graph.total();

        graph.give(0);
        assert_eq!(graph.total(), before);

        graph.take(2);
        graph.give(3);
        assert_eq!(graph.total(), before);
    }

    #[test]
    fn take_undoes_give() {
        let mut graph = cycle(vec![1, -1, 2, -2]);
        let original = graph.values().to_vec();

        for node in 0..4 {
            let mv = Move::give(node);
            graph.apply(mv);
            graph.apply(mv.inverse());
            assert_eq!(graph.values(), original.as_slice());
        }
    }

    #[test]
    fn solvability_follows_genus() {
        let exactly = cycle(vec![1, -1, 2, -1]);
        assert_eq!(exactly.genus(), 1);
        assert!(exactly.is_solvable());

        let short = cycle(vec![1, -1, 2, -2]);
        assert!(!short.is_solvable());
    }

    #[test]
    fn non_negative_graph_is_solved() {
        let graph = cycle(vec![0, 3, 0, 1]);
        assert!(graph.is_solved());

        let outcome = quick_supervisor().run(Arc::new(samples::GIVE_RICHEST), &graph).unwrap();
        assert_eq!(outcome, SolveOutcome::Solved { moves: vec![] });
    }

    #[test]
    fn build_rejects_bad_edges() {
        assert_eq!(
            Graph::build(vec![0, 0], [UnorderedPair(0, 2)]).unwrap_err(),
            MalformedGraph::NodeOutOfRange { node: 2, node_count: 2 }
        );
        assert_eq!(
            Graph::build(vec![0, 0], [UnorderedPair(0, 1), UnorderedPair(1, 1)]).unwrap_err(),
            MalformedGraph::SelfLoop { node: 1 }
        );
    }

    #[test]
    fn duplicate_edges_collapse() {
        let graph = Graph::build(vec![0, 0, 0], [UnorderedPair(0, 1), UnorderedPair(1, 0), UnorderedPair(1, 2)]).unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.degree(1), 2);
    }

    #[test]
    fn neighbors_keep_insertion_order() {
        let graph = Graph::build(vec![0, 0, 0, 0], [UnorderedPair(0, 3), UnorderedPair(2, 0), UnorderedPair(0, 1)]).unwrap();
        assert_eq!(graph.neighbors(0).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(graph.neighbors(2).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn clone_is_independent() {
        let original = cycle(vec![1, -1, 2, -2]);
        let mut copy = original.clone();
        copy.give(1);

        assert_eq!(original.values(), &[1, -1, 2, -2]);
        assert_eq!(copy.values(), &[2, -3, 3, -2]);
    }

    #[test]
    #[should_panic]
    fn out_of_range_move_panics() {
        let mut graph = cycle(vec![1, 1, 1]);
        graph.give(3);
    }

    #[test]
    fn display_lists_neighbors() {
        let graph = Graph::build(vec![2, -1, 0], [UnorderedPair(0, 1), UnorderedPair(0, 2)]).unwrap();
        assert_eq!(graph.to_string(), "0: 2 -> [1, 2]\n1: -1 -> [0]\n2: 0 -> [0]\n");
    }

    #[test]
    fn moves_parse_and_print() {
        assert_eq!("Take".parse::<MoveKind>().unwrap(), MoveKind::Take);
        assert_eq!(Move::give(3).to_string(), "Give(3)");
        assert_eq!(Move::take(3).inverse(), Move::give(3));
    }

    #[test]
    fn dangling_node_is_malformed() {
        let graph = Graph::build(vec![1, 1, 1, 5], [UnorderedPair(0, 1), UnorderedPair(1, 2), UnorderedPair(2, 0)]).unwrap();
        assert!(matches!(
            check_preconditions(&graph),
            Err(Error::MalformedGraph(MalformedGraph::DanglingNode { node: 3 }))
        ));
        assert!(matches!(
            quick_supervisor().run(Arc::new(samples::TAKE_POOREST), &graph),
            Err(Error::MalformedGraph(MalformedGraph::DanglingNode { node: 3 }))
        ));
    }

    #[test]
    fn unsolvable_graph_is_rejected() {
        let graph = cycle(vec![1, -1, 2, -2]);
        assert!(matches!(
            quick_supervisor().run(Arc::new(samples::TAKE_POOREST), &graph),
            Err(Error::UnsolvableGraph { total: 0, genus: 1 })
        ));
    }

    #[test]
    fn context_stops_past_move_limit() {
        let graph = cycle(vec![2, -1, 2, -2]);
        let mut ctx = SolverContext::new(&graph, 2);

        ctx.give(0);
        ctx.take(0);
        assert!(!ctx.is_solved());

        ctx.give(0);
        assert!(ctx.is_solved());
        assert!(ctx.was_stopped());
        assert!(!ctx.graph().is_solved());
        assert_eq!(ctx.moves().len(), 3);
    }

    #[test]
    fn context_plays_on_a_copy() {
        let graph = cycle(vec![2, -1, 2, -2]);
        let mut ctx = SolverContext::new(&graph, 10);
        ctx.take(3);

        assert_eq!(graph.values(), &[2, -1, 2, -2]);
        assert_eq!(ctx.graph().values(), &[1, -1, 1, 0]);
        assert_eq!(ctx.into_moves(), vec![Move::take(3)]);
    }

    #[test]
    fn supervisor_reports_moves() {
        let graph = cycle(vec![2, -1, 2, -2]);
        let outcome = quick_supervisor().run(Arc::new(samples::TAKE_POOREST), &graph).unwrap();
        assert_eq!(outcome, SolveOutcome::Solved { moves: vec![Move::take(3), Move::take(1)] });
    }

    #[test]
    fn supervisor_enforces_move_limit() {
        fn dither(ctx: &mut SolverContext) {
            while !ctx.is_solved() {
                ctx.give(0);
                ctx.take(0);
            }
        }

        let supervisor = Supervisor::new(SupervisorConfig::default().with_move_limit(10));
        let outcome = supervisor.run(Arc::new(BuiltinSolver::new("Dither", "", dither)), &cycle(vec![2, -1, 2, -2])).unwrap();
        assert_eq!(outcome, SolveOutcome::Failed(SolveFailure::MoveLimit));
    }

    #[test]
    fn supervisor_stops_polling_solver() {
        fn idle(ctx: &mut SolverContext) {
            while !ctx.is_solved() {
                thread::sleep(Duration::from_millis(1));
            }
        }

        let outcome = quick_supervisor().run(Arc::new(BuiltinSolver::new("Idle", "", idle)), &cycle(vec![2, -1, 2, -2])).unwrap();
        assert_eq!(outcome, SolveOutcome::Failed(SolveFailure::TimedOut));
        assert_eq!(outcome.moves(), None);
    }

    #[test]
    fn supervisor_abandons_deaf_solver() {
        fn deaf(ctx: &mut SolverContext) {
            ctx.give(0);
            loop {
                thread::sleep(Duration::from_millis(5));
            }
        }

        let started = Instant::now();
        let outcome = quick_supervisor().run(Arc::new(BuiltinSolver::new("Deaf", "", deaf)), &cycle(vec![2, -1, 2, -2])).unwrap();

        assert_eq!(outcome, SolveOutcome::Failed(SolveFailure::Unresponsive));
        assert_eq!(outcome.moves(), None);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn supervisor_survives_panics() {
        let outcome = quick_supervisor().run(Arc::new(Panicking), &cycle(vec![2, -1, 2, -2])).unwrap();
        assert_eq!(outcome, SolveOutcome::Failed(SolveFailure::Crashed("boom".to_owned())));
    }

    #[test]
    fn supervisor_logs_errors_after_stop() {
        struct GivesUp;

        impl Solver for GivesUp {
            fn name(&self) -> &str {
                "GivesUp"
            }

            fn description(&self) -> &str {
                "Waits for the stop signal, then fails."
            }

            fn solve(&self, ctx: &mut SolverContext) -> crate::Result<()> {
                while !ctx.is_solved() {
                    thread::sleep(Duration::from_millis(1));
                }
                Err(Error::PluginPanicked { name: "GivesUp".to_owned() })
            }
        }

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let outcome = tracing::subscriber::with_default(subscriber, || {
            quick_supervisor().run(Arc::new(GivesUp), &cycle(vec![2, -1, 2, -2])).unwrap()
        });

        assert_eq!(outcome, SolveOutcome::Failed(SolveFailure::TimedOut));
        let logs = logs.contents();
        assert!(logs.contains("solver crashed after being asked to stop"), "{}", logs);
        assert!(logs.contains("plugin `GivesUp` panicked"), "{}", logs);
    }

    #[test]
    fn solver_stopping_itself_is_not_a_move_limit() {
        fn quitter(ctx: &mut SolverContext) {
            ctx.take(3);
            ctx.stop();
        }

        let outcome = quick_supervisor().run(Arc::new(BuiltinSolver::new("Quitter", "", quitter)), &cycle(vec![2, -1, 2, -2])).unwrap();
        assert_eq!(outcome, SolveOutcome::Solved { moves: vec![Move::take(3)] });
    }

    #[test]
    fn nul_in_solver_name_is_harmless() {
        let solver = BuiltinSolver::new("Take\0Poorest", "", samples::take_poorest);
        let outcome = quick_supervisor().run(Arc::new(solver), &cycle(vec![2, -1, 2, -2])).unwrap();
        assert_eq!(outcome, SolveOutcome::Solved { moves: vec![Move::take(3), Move::take(1)] });
    }

    #[test]
    fn exported_entry_points_report_names() {
        let read = |ptr: *const c_char| unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();

        assert_eq!(read(exported::GENERATOR_getName()), "StrictStar");
        assert_eq!(read(exported::GENERATOR_getDescription()), "Star, refusing empty graphs.");
        assert_eq!(read(exported::SOLVER_getName()), "StrictTakePoorest");
        assert_eq!(read(exported::SOLVER_getDescription()), "TakePoorest, refusing single nodes.");
    }

    #[test]
    fn exported_generator_catches_panics() {
        let mut rng = StdRng::seed_from_u64(5);

        let mut ctx = GeneratorContext::new(&mut rng);
        assert!(exported::GENERATOR_generate(&mut ctx, &GeneratorParams::new(4, 1, 1)));
        let star = ctx.into_built().unwrap().unwrap();
        assert_eq!(star.degree(0), 3);

        let mut ctx = GeneratorContext::new(&mut rng);
        assert!(!exported::GENERATOR_generate(&mut ctx, &GeneratorParams::new(0, 1, 1)));
        assert!(ctx.graph().is_none());
    }

    #[test]
    fn exported_solver_catches_panics() {
        let mut ctx = SolverContext::new(&cycle(vec![2, -1, 2, -2]), 100);
        assert!(exported::SOLVER_solve(&mut ctx));
        assert_eq!(ctx.into_moves(), vec![Move::take(3), Move::take(1)]);

        let lonely = Graph::build(vec![-1], []).unwrap();
        let mut ctx = SolverContext::new(&lonely, 100);
        assert!(!exported::SOLVER_solve(&mut ctx));
        assert!(ctx.moves().is_empty());
    }

    #[test]
    fn generation_yields_playable_graphs() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = GeneratorParams::new(6, -5, 10);
        for generator in samples::generators() {
            for _ in 0..25 {
                let graph = generate_graph(generator.as_ref(), &mut rng, &params).unwrap();
                assert_eq!(graph.len(), 6);
                assert!(graph.is_solvable());
                assert!(!graph.is_solved());
            }
        }
    }

    #[test]
    fn generation_skips_degenerate_graphs() {
        struct Scripted {
            calls: AtomicUsize,
        }

        impl Generator for Scripted {
            fn name(&self) -> &str {
                "Scripted"
            }

            fn description(&self) -> &str {
                "Solved, then unsolvable, then playable."
            }

            fn generate(&self, ctx: &mut GeneratorContext<'_>, _params: &GeneratorParams) -> crate::Result<()> {
                let values = match self.calls.fetch_add(1, Ordering::SeqCst) {
                    0 => vec![1, 1, 1, 1],
                    1 => vec![1, -1, 2, -2],
                    _ => vec![2, -1, 2, -2],
                };
                ctx.build(values, [UnorderedPair(0, 1), UnorderedPair(1, 2), UnorderedPair(2, 3), UnorderedPair(3, 0)])?;
                Ok(())
            }
        }

        let generator = Scripted { calls: AtomicUsize::new(0) };
        let graph = generate_graph(&generator, &mut StdRng::seed_from_u64(0), &GeneratorParams::default()).unwrap();

        assert_eq!(graph.values(), &[2, -1, 2, -2]);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn generator_without_graph_is_a_contract_violation() {
        fn lazy(_ctx: &mut GeneratorContext<'_>, _params: &GeneratorParams) -> Result<(), MalformedGraph> {
            Ok(())
        }

        let result = generate_graph(&BuiltinGenerator::new("Lazy", "", lazy), &mut StdRng::seed_from_u64(0), &GeneratorParams::default());
        assert!(matches!(result, Err(Error::NoGraphProduced { name }) if name == "Lazy"));
    }

    #[test]
    fn generator_building_bad_graph_fails() {
        fn broken(ctx: &mut GeneratorContext<'_>, _params: &GeneratorParams) -> Result<(), MalformedGraph> {
            ctx.build(vec![1], [UnorderedPair(0, 4)]).map(|_| ())
        }

        let result = generate_graph(&BuiltinGenerator::new("Broken", "", broken), &mut StdRng::seed_from_u64(0), &GeneratorParams::default());
        assert!(matches!(result, Err(Error::MalformedGraph(MalformedGraph::NodeOutOfRange { node: 4, node_count: 1 }))));
    }

    #[test]
    fn generator_context_keeps_last_build() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = GeneratorContext::new(&mut rng);
        assert!(ctx.graph().is_none());

        assert_eq!(ctx.build(vec![1, 2], [UnorderedPair(0, 1)]).unwrap().edge_count(), 1);
        assert!(ctx.graph().is_some());
        assert!(ctx.build(vec![1], [UnorderedPair(0, 0)]).is_err());
        assert!(ctx.graph().is_none());
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut a = GraphSource::seeded(Arc::new(samples::UNIFORM), GeneratorParams::new(8, -3, 3), 42);
        let mut b = GraphSource::seeded(Arc::new(samples::UNIFORM), GeneratorParams::new(8, -3, 3), 42);
        for _ in 0..5 {
            assert_eq!(a.next_graph().unwrap().to_string(), b.next_graph().unwrap().to_string());
        }
    }

    #[test]
    fn sample_generators_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = GeneratorParams::new(5, 0, 0);

        let mut generate = |f: GenerateFn, params: GeneratorParams| {
            let mut ctx = GeneratorContext::new(&mut rng);
            f(&mut ctx, &params).unwrap();
            ctx.into_built().unwrap().unwrap()
        };

        let ring = generate(samples::circular, params);
        assert_eq!(ring.edge_count(), 5);
        assert!((0..5).all(|node| ring.degree(node) == 2));

        let star = generate(samples::star, params);
        assert_eq!(star.edge_count(), 4);
        assert_eq!(star.degree(0), 4);

        let uniform = generate(samples::uniform, params.with_size(8));
        assert_eq!(uniform.dangling_nodes().count(), 0);
        assert!((0..8).all(|node| uniform.degree(node) >= 2));
    }

    #[test]
    fn registry_lookup_and_shadowing() {
        let mut registry = Registry::with_builtins();
        assert_eq!(registry.generator("Star").unwrap().name(), "Star");
        assert!(registry.solver("Nope").is_none());

        registry.add(Plugin::Solver(Arc::new(BuiltinSolver::new("GiveRichest", "Replacement.", samples::give_richest))));
        assert_eq!(registry.solver("GiveRichest").unwrap().description(), "Replacement.");
        assert_eq!(
            registry.solvers().iter().map(|s| s.name().to_owned()).collect::<Vec<_>>(),
            vec!["GiveRichest", "TakePoorest", "BogoSolver"]
        );
    }

    #[test]
    fn discovery_skips_broken_modules() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        assert_eq!(registry.discover(dir.path()).unwrap(), 0);

        let solvers = dir.path().join(SOLVERS_DIR);
        fs::create_dir(&solvers).unwrap();
        fs::write(solvers.join(format!("fake.{}", std::env::consts::DLL_EXTENSION)), b"not a library").unwrap();
        fs::write(solvers.join("notes.txt"), b"ignored").unwrap();

        assert_eq!(registry.discover(dir.path()).unwrap(), 0);
        assert!(registry.solvers().is_empty());
    }

    #[test]
    fn loading_missing_file_fails() {
        let result = DynamicSolver::load("/definitely/not/here/solver.so");
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn loading_foreign_library_names_missing_entry_point() {
        match Plugin::load("libc.so.6") {
            Err(Error::UnsupportedModule { entry_point, .. }) => assert_eq!(entry_point, "SOLVER_getName"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(plugin) => panic!("libc loaded as plugin `{}`", plugin.name()),
        }
    }

    #[test]
    fn compare_averages_moves() {
        let mut source = GraphSource::seeded(Arc::new(FIXED), GeneratorParams::default(), 1);
        let solvers: Vec<Arc<dyn Solver>> = vec![Arc::new(samples::TAKE_POOREST)];
        let comparison = bench::compare(&mut source, &solvers, 3, &quick_supervisor(), RetryPolicy::default()).unwrap();

        assert_eq!(comparison.samples().nrows(), 3);
        assert_eq!(comparison.skipped(), 0);
        assert_eq!(comparison.averages().unwrap().to_vec(), vec![2.0]);
        assert_eq!(
            comparison.to_string(),
            "| TakePoorest | \n|           2 | \n|           2 | \n|           2 | \n#\n# AVERAGE NUM MOVES\n#\n| TakePoorest | \n|        2.00 | \n"
        );
    }

    #[test]
    fn compare_skips_hopeless_samples() {
        let mut source = GraphSource::seeded(Arc::new(FIXED), GeneratorParams::default(), 1);
        let solvers: Vec<Arc<dyn Solver>> = vec![Arc::new(samples::TAKE_POOREST), Arc::new(Panicking)];
        let policy = RetryPolicy::default().with_max_attempts(Some(2));
        let comparison = bench::compare(&mut source, &solvers, 2, &quick_supervisor(), policy).unwrap();

        assert_eq!(comparison.skipped(), 2);
        assert!(comparison.averages().is_none());
    }

    #[test]
    fn benchmark_writes_csv() {
        let generators: Vec<Arc<dyn Generator>> = vec![Arc::new(FIXED)];
        let table = bench::benchmark(
            Arc::new(samples::TAKE_POOREST),
            &generators,
            &[4, 12],
            2,
            GeneratorParams::default(),
            &mut StdRng::seed_from_u64(0),
            &quick_supervisor(),
            RetryPolicy::default(),
        ).unwrap();

        let mut csv = Vec::new();
        table.write_csv(&mut csv).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), ";Fixed\n4;2.00\n12;2.00\n");
    }
}
