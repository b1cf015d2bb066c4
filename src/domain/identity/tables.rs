//! Fixed lookup tables backing generated identities.
//!
//! Both tables are part of the identity format: the generator indexes into
//! them by position, so reordering, inserting or removing an entry changes
//! the pseudonym of every existing participant. Append-only changes are
//! still breaking. Treat any edit as a format version bump.

use serde::{Deserialize, Serialize};

/// Number of entries in [`ANIMALS`].
pub const ANIMAL_COUNT: usize = 331;

/// Ordered animal names. Duplicates are intentional and must stay.
pub const ANIMALS: [&str; ANIMAL_COUNT] = [
    "Aardvark", "Aardwolf", "Albatross", "Alligator", "Alpaca", "Amphibian", "Anaconda",
    "Angelfish", "Ant", "Anteater", "Antelope", "Antlion", "Ape", "Aphid", "Armadillo", "Asp",
    "Baboon", "Badger", "Bandicoot", "Barnacle", "Barracuda", "Basilisk", "Bass", "Bat", "Bear",
    "Beaver", "Bedbug", "Bee", "Beetle", "Bird", "Bison", "Blackbird", "Boa", "Boar", "Bobcat",
    "Bobolink", "Bonobo", "Booby", "Bovid", "Bug", "Butterfly", "Buzzard", "Camel", "Canid",
    "Canidae", "Capybara", "Cardinal", "Caribou", "Carp", "Cat", "Catfish", "Catshark",
    "Cattle", "Cattle", "Centipede", "Chameleon", "Cheetah", "Chickadee", "Chicken", "Chipmunk",
    "Cicada", "Clam", "Clownfish", "Cobra", "Cockroach", "Cod", "Condor", "Coral", "Cougar",
    "Cow", "Coyote", "Crab", "Crane", "Crawdad", "Crayfish", "Cricket", "Crocodile", "Crow",
    "Cuckoo", "Damselfly", "Deer", "Dingo", "Dinosaur", "Dog", "Dolphin", "Donkey", "Dormouse",
    "Dove", "Dragon", "Dragonfly", "Duck", "Eagle", "Earthworm", "Earwig", "Echidna", "Eel",
    "Egret", "Elephant", "Elk", "Emu", "Ermine", "Falcon", "Felidae", "Ferret", "Ferret",
    "Finch", "Firefly", "Fish", "Flamingo", "Flea", "Fly", "Fowl", "Fox", "Frog", "Galliform",
    "Gamefowl", "Gayal", "Gazelle", "Gecko", "Gerbil", "Gibbon", "Giraffe", "Goat", "Goldfish",
    "Goose", "Gopher", "Gorilla", "Grouse", "Guan", "Guanaco", "Gull", "Guppy", "Haddock",
    "Halibut", "Hamster", "Hare", "Harrier", "Hawk", "Hedgehog", "Heron", "Herring", "Hookworm",
    "Hornet", "Horse", "Hoverfly", "Hyena", "Iguana", "Impala", "Jackal", "Jaguar", "Jay",
    "Jellyfish", "Kangaroo", "Kite", "Kiwi", "Koala", "Koi", "Krill", "Ladybug", "Lamprey",
    "Landfowl", "Lark", "Leech", "Lemming", "Lemur", "Leopard", "Leopon", "Limpet", "Lion",
    "Lizard", "Llama", "Lobster", "Locust", "Loon", "Louse", "Lungfish", "Lynx", "Macaw",
    "Mackerel", "Magpie", "Mammal", "Manatee", "Mandrill", "Marlin", "Marmoset", "Marmot",
    "Marsupial", "Marten", "Mastodon", "Meerkat", "Mink", "Minnow", "Mite", "Mole", "Mollusk",
    "Mongoose", "Monkey", "Moose", "Mosquito", "Moth", "Mouse", "Mule", "Muskox", "Narwhal",
    "Newt", "Ocelot", "Octopus", "Opossum", "Orangutan", "Orca", "Ostrich", "Otter", "Owl",
    "Ox", "Panda", "Panther", "Parakeet", "Parrot", "Partridge", "Peacock", "Peafowl",
    "Pelican", "Penguin", "Perch", "Pheasant", "Pig", "Pigeon", "Pike", "Pinniped", "Piranha",
    "Planarian", "Platypus", "Pony", "Porcupine", "Porpoise", "Possum", "Prawn", "Primate",
    "Ptarmigan", "Puffin", "Puma", "Python", "Quail", "Quelea", "Quokka", "Rabbit", "Raccoon",
    "Rat", "Raven", "Reindeer", "Reptile", "Rodent", "Rook", "Rooster", "Roundworm", "Sailfish",
    "Salmon", "Sawfish", "Scallop", "Scorpion", "Seahorse", "Shark", "Sheep", "Shrew", "Shrimp",
    "Silkworm", "Skunk", "Sloth", "Slug", "Smelt", "Snail", "Snake", "Snipe", "Sole", "Sparrow",
    "Spider", "Spoonbill", "Squid", "Squirrel", "Starfish", "Stingray", "Stoat", "Stork",
    "Sturgeon", "Swallow", "Swan", "Swift", "Swordfish", "Swordtail", "Tahr", "Takin", "Tapir",
    "Tarantula", "Tarsier", "Termite", "Tern", "Thrush", "Tick", "Tiger", "Tiglon", "Toad",
    "Tortoise", "Toucan", "Trout", "Tuna", "Turkey", "Turtle", "Urial", "Vicuna", "Viper",
    "Vole", "Vulture", "Wallaby", "Walrus", "Warbler", "Wasp", "Weasel", "Whale", "Whippet",
    "Whitefish", "Wildcat", "Wildfowl", "Wolf", "Wolverine", "Wombat", "Worm", "Wren",
    "Xerinae", "Yak", "Yak", "Zebra",
];

/// Visual gradient tag assigned to a participant.
///
/// `Unknown` is a reserved sentinel at table position zero and is never
/// produced by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradientColor {
    Unknown,
    Azalea,
    Celadon,
    Cerulean,
    Chartreuse,
    Cinnabar,
    Fuschia,
    Goldenrod,
    Lavender,
    Mahogany,
    Mauve,
    Saffron,
    Seafoam,
    Taupe,
    Turquoise,
    Vermillion,
    Violet,
    Viridian,
}

/// Ordered gradient table. Index 0 is the `Unknown` sentinel.
pub const GRADIENT_COLORS: [GradientColor; 18] = [
    GradientColor::Unknown,
    GradientColor::Azalea,
    GradientColor::Celadon,
    GradientColor::Cerulean,
    GradientColor::Chartreuse,
    GradientColor::Cinnabar,
    GradientColor::Fuschia,
    GradientColor::Goldenrod,
    GradientColor::Lavender,
    GradientColor::Mahogany,
    GradientColor::Mauve,
    GradientColor::Saffron,
    GradientColor::Seafoam,
    GradientColor::Taupe,
    GradientColor::Turquoise,
    GradientColor::Vermillion,
    GradientColor::Violet,
    GradientColor::Viridian,
];

impl GradientColor {
    /// Lowercase storage name, e.g. `"azalea"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            GradientColor::Unknown => "unknown",
            GradientColor::Azalea => "azalea",
            GradientColor::Celadon => "celadon",
            GradientColor::Cerulean => "cerulean",
            GradientColor::Chartreuse => "chartreuse",
            GradientColor::Cinnabar => "cinnabar",
            GradientColor::Fuschia => "fuschia",
            GradientColor::Goldenrod => "goldenrod",
            GradientColor::Lavender => "lavender",
            GradientColor::Mahogany => "mahogany",
            GradientColor::Mauve => "mauve",
            GradientColor::Saffron => "saffron",
            GradientColor::Seafoam => "seafoam",
            GradientColor::Taupe => "taupe",
            GradientColor::Turquoise => "turquoise",
            GradientColor::Vermillion => "vermillion",
            GradientColor::Violet => "violet",
            GradientColor::Viridian => "viridian",
        }
    }

    /// Parses a storage name produced by [`GradientColor::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        GRADIENT_COLORS.iter().copied().find(|c| c.as_str() == lower)
    }
}
