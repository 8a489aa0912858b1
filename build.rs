fn main() {
    println!("cargo::rerun-if-changed=schemas/azdev.graphql");
    cynic_codegen::register_schema("azdev")
        .from_sdl_file("schemas/azdev.graphql")
        .unwrap()
        .as_default()
        .unwrap();
}
