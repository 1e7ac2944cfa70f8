// Language managers: one plugin per supported hook language, looked up through the registry

pub mod base;
pub mod conda;
pub mod coursier;
pub mod dart;
pub mod docker;
pub mod dotnet;
pub mod golang;
pub mod haskell;
pub mod julia;
pub mod lua;
pub mod nodejs;
pub mod perl;
pub mod python;
pub mod r;
pub mod registry;
pub mod ruby;
pub mod rust;
pub mod swift;
pub mod system;
pub mod traits;

pub use base::version_matches;
pub use conda::CondaLanguagePlugin;
pub use coursier::CoursierLanguagePlugin;
pub use dart::DartLanguagePlugin;
pub use docker::{DockerImageLanguagePlugin, DockerLanguagePlugin};
pub use dotnet::DotnetLanguagePlugin;
pub use golang::GolangLanguagePlugin;
pub use haskell::HaskellLanguagePlugin;
pub use julia::JuliaLanguagePlugin;
pub use lua::LuaLanguagePlugin;
pub use nodejs::NodejsLanguagePlugin;
pub use perl::PerlLanguagePlugin;
pub use python::PythonLanguagePlugin;
pub use r::RLanguagePlugin;
pub use registry::LanguageRegistry;
pub use ruby::RubyLanguagePlugin;
pub use rust::RustLanguagePlugin;
pub use swift::SwiftLanguagePlugin;
pub use system::SystemLanguagePlugin;
pub use traits::{Language, LanguageVersion, SetupContext};
