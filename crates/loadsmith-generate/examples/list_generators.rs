use loadsmith_generate::GeneratorRegistry;

fn main() {
    let registry = GeneratorRegistry::new();
    for id in registry.ids() {
        let arity = registry.signature(id).map(<[_]>::len).unwrap_or_default();
        println!("{id} ({arity} params)");
    }
}
