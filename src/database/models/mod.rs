pub mod drink;

pub use drink::{Drink, DrinkError, DrinkPatch, Ingredient, NewDrink, Recipe, ShortDrink};
