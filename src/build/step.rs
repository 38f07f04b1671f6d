//! Build step descriptors.
//!
//! A build plan is a fixed, ordered list of steps. Adjacent steps marked
//! independent write to disjoint outputs and may run in parallel.

/// Kind of build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Remove the output directory
    Clean,
    /// Copy `images/` verbatim
    CopyImages,
    /// Copy `fonts/` verbatim
    CopyFonts,
    /// Compile `styles/app.scss` to `styles.min.css`
    Styles,
    /// Bundle `scripts/**` into `scripts.min.js`
    Scripts,
    /// Render the entry view to `index.html`
    Markup,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Clean => write!(f, "clean"),
            StepKind::CopyImages => write!(f, "images"),
            StepKind::CopyFonts => write!(f, "fonts"),
            StepKind::Styles => write!(f, "styles"),
            StepKind::Scripts => write!(f, "scripts"),
            StepKind::Markup => write!(f, "markup"),
        }
    }
}

/// One entry in a build plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// What the step does
    pub kind: StepKind,
    /// May run alongside adjacent independent steps
    pub independent: bool,
}

impl Step {
    /// A step that runs alone, in order.
    pub fn new(kind: StepKind) -> Self {
        Self { kind, independent: false }
    }

    /// A step that may share a batch with neighbouring independent steps.
    pub fn independent(kind: StepKind) -> Self {
        Self { kind, independent: true }
    }
}

/// An ordered list of build steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    steps: Vec<Step>,
}

impl BuildPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// The one-shot build: clean, copy assets, then compile styles, scripts and markup.
    pub fn full() -> Self {
        Self::new()
            .with_step(Step::new(StepKind::Clean))
            .with_step(Step::independent(StepKind::CopyImages))
            .with_step(Step::independent(StepKind::CopyFonts))
            .with_step(Step::new(StepKind::Styles))
            .with_step(Step::new(StepKind::Scripts))
            .with_step(Step::new(StepKind::Markup))
    }

    /// Append a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a step in place.
    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step kinds in execution order.
    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }

    /// Whether the plan has a step of this kind.
    pub fn contains(&self, kind: StepKind) -> bool {
        self.steps.iter().any(|s| s.kind == kind)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Split the plan into batches executed one after another.
    ///
    /// A run of adjacent independent steps forms one batch; every other
    /// step is a batch of its own.
    pub fn batches(&self) -> Vec<&[Step]> {
        let mut batches = Vec::new();
        let mut start = 0;

        while start < self.steps.len() {
            let mut end = start + 1;
            if self.steps[start].independent {
                while end < self.steps.len() && self.steps[end].independent {
                    end += 1;
                }
            }
            batches.push(&self.steps[start..end]);
            start = end;
        }

        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_plan_order() {
        let plan = BuildPlan::full();
        assert_eq!(
            plan.kinds(),
            vec![
                StepKind::Clean,
                StepKind::CopyImages,
                StepKind::CopyFonts,
                StepKind::Styles,
                StepKind::Scripts,
                StepKind::Markup,
            ]
        );
    }

    #[test]
    fn test_full_plan_batches() {
        let plan = BuildPlan::full();
        let sizes: Vec<usize> = plan.batches().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1, 2, 1, 1, 1]);
        assert_eq!(plan.batches()[0][0].kind, StepKind::Clean);
    }

    #[test]
    fn test_batches_split_by_dependent_step() {
        let plan = BuildPlan::new()
            .with_step(Step::independent(StepKind::CopyImages))
            .with_step(Step::new(StepKind::Styles))
            .with_step(Step::independent(StepKind::CopyFonts));
        let sizes: Vec<usize> = plan.batches().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1, 1, 1]);
    }

    #[test]
    fn test_empty_plan() {
        let plan = BuildPlan::new();
        assert!(plan.is_empty());
        assert!(plan.batches().is_empty());
    }

    #[test]
    fn test_step_kind_display() {
        assert_eq!(StepKind::CopyFonts.to_string(), "fonts");
    }
}
