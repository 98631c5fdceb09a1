fn main() {
    reassigner::start(std::env::args());
}
