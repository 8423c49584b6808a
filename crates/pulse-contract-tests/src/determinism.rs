#![forbid(unsafe_code)]

#[cfg(test)]
mod tests {
    use pulse_show::{Presenter, Scene, SceneBuffer, ScriptEvent, ShowDescriptor};

    fn show(scene_order: &[&str]) -> ShowDescriptor {
        let mut builder = ShowDescriptor::builder(128.0, 64).presenter("p", Presenter::new(""));
        for id in scene_order {
            builder = builder.scene(*id, Scene::new(SceneBuffer::new("")));
        }
        builder
            .initial("p", "alpha", "beta")
            .at(8, ScriptEvent::SetStage0("gamma".into()))
            .at(16, ScriptEvent::SetStage1("alpha".into()))
            .build_unchecked()
    }

    /// Determinism contract:
    /// handles and the expanded table do not depend on declaration order.
    #[test]
    fn expansion_is_independent_of_declaration_order() {
        let a = show(&["alpha", "beta", "gamma"]);
        let b = show(&["gamma", "alpha", "beta"]);

        let (ia, ta) = a.expand().expect("expand a");
        let (ib, tb) = b.expand().expect("expand b");

        for id in ["alpha", "beta", "gamma"] {
            assert_eq!(
                ia.scene(&id.into(), "test").expect("scene a"),
                ib.scene(&id.into(), "test").expect("scene b"),
                "scene handle for {id} must be stable"
            );
        }
        let stages = |t: &pulse_show::ExpandedScript| {
            t.entries()
                .iter()
                .map(|e| (e.presenter, e.stage0, e.stage1))
                .collect::<Vec<_>>()
        };
        assert_eq!(stages(&ta), stages(&tb));
    }

    /// Expanding the same descriptor twice yields the same table.
    #[test]
    fn expansion_is_repeatable() {
        let s = show(&["alpha", "beta", "gamma"]);
        let (_, t1) = s.expand().expect("expand 1");
        let (_, t2) = s.expand().expect("expand 2");
        assert_eq!(t1.len(), t2.len());
        for (e1, e2) in t1.entries().iter().zip(t2.entries()) {
            assert_eq!((e1.presenter, e1.stage0, e1.stage1), (e2.presenter, e2.stage0, e2.stage1));
        }
    }
}
