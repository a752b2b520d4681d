//! Static recipe catalogue. Each step has a fixed timer length; its id is the
//! client id the server stores the timer under.

#[derive(Debug, PartialEq, Eq)]
pub struct Recipe {
    pub title: &'static str,
    pub steps: &'static [Step],
}

#[derive(Debug, PartialEq, Eq)]
pub struct Step {
    pub id: &'static str,
    pub text: &'static str,
    pub minutes: u32,
}

pub static RECIPES: [Recipe; 3] = [
    Recipe {
        title: "Bread dough",
        steps: &[
            Step {
                id: "dough_1",
                text: "Let the dough rise",
                minutes: 60,
            },
            Step {
                id: "dough_2",
                text: "Shape and proof again",
                minutes: 30,
            },
        ],
    },
    Recipe {
        title: "Roast chicken",
        steps: &[
            Step {
                id: "chicken_1",
                text: "Marinate",
                minutes: 120,
            },
            Step {
                id: "chicken_2",
                text: "Roast in the oven",
                minutes: 45,
            },
        ],
    },
    Recipe {
        title: "Quick test",
        steps: &[Step {
            id: "test_1",
            text: "One-minute test timer",
            minutes: 1,
        }],
    },
];

pub fn steps() -> impl Iterator<Item = (&'static Recipe, &'static Step)> {
    RECIPES
        .iter()
        .flat_map(|recipe| recipe.steps.iter().map(move |step| (recipe, step)))
}

pub fn find_step(step_id: &str) -> Option<(&'static Recipe, &'static Step)> {
    steps().find(|(_, step)| step.id == step_id)
}

pub fn timer_message(recipe: &Recipe, minutes: u32) -> String {
    format!("Recipe \"{}\": {minutes}-minute timer finished!", recipe.title)
}
